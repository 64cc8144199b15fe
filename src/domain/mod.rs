//! Core domain types for the data model.

pub mod calendar;
pub mod company;
pub mod corporate_action;
pub mod error;
pub mod etl_run;
pub mod event;
pub mod feature;
pub mod fundamentals;
pub mod model;
pub mod price;
pub mod validation;
