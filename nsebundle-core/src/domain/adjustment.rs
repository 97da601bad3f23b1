use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ids::Sid;

/// Split adjustment. `ratio` is the price multiplier, i.e. `1 / split_ratio`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRecord {
    pub sid: Sid,
    pub effective_date: NaiveDate,
    pub ratio: f64,
}

/// Cash dividend. The provider supplies only the ex-date and amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendRecord {
    pub sid: Sid,
    pub ex_date: NaiveDate,
    pub amount: f64,
    pub record_date: Option<NaiveDate>,
    pub declared_date: Option<NaiveDate>,
    pub pay_date: Option<NaiveDate>,
}
