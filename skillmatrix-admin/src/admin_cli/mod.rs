pub mod access_commands;
pub mod department_commands;
pub mod user_commands;
pub mod utils;
