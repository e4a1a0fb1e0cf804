pub mod bot;
pub mod callback_data;

pub const ERROR: &str = "Что-то пошло не так. Пожалуйста, попробуйте позже.";
