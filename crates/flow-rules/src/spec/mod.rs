pub mod flow;
pub mod order;
pub mod question;

pub use flow::Flow;
pub use order::OrderKey;
pub use question::{Question, QuestionType};
