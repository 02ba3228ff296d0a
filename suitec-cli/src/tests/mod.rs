//! Shared test harness modules for the SuiteC CLI.

use super::*;

mod parsing;
mod unit;
