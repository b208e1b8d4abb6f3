pub mod corpus;
pub mod minimize;
pub mod run;

pub use corpus::CorpusCommand;
pub use minimize::MinimizeCommand;
pub use run::RunCommand;
