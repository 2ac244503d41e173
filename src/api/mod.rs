pub mod client;
pub mod methods;
pub mod params;

pub use client::{mask_token, ApiClient, RequestLogger, DEFAULT_BASE_URL};
pub use params::{Encoding, InputFile, ParamValue, Parameters};
