pub mod function_key;
pub mod request_id;

pub use function_key::{function_key_middleware, FunctionKey, FUNCTION_KEY_HEADER};
pub use request_id::{request_id_middleware, REQUEST_ID_HEADER};
