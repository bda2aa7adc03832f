//! From fill scores to grades.
//!
//! - [`AnswerKey`] validates the correct option per question;
//! - [`decide`] classifies a question's scores as blank, single or multiple;
//! - [`grade`] compares decisions with the key;
//! - [`GradingReport`] derives detailed statistics and advisory flags.

mod decision;
mod grading;
mod key;
mod report;

pub use decision::{best_guess, decide, decide_all, Decision, DecisionParams};
pub use grading::{grade, GradingResult, QuestionDetail, QuestionStatus};
pub use key::{AnswerKey, AnswerKeyError, KeyIssue};
pub use report::{
    AdvisoryFlag, CategoryLists, GradingReport, OptionDistribution, StatusCounts, StatusPercentages,
};
