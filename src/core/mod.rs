pub mod convert;
pub mod locale;
pub mod settings;
