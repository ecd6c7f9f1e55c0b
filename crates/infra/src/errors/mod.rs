pub(crate) mod conversions;

pub(crate) use conversions::{retry_after, status_error, IntoApiError};
