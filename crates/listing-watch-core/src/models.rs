//! Core data models used throughout listing-watch.
//!
//! A [`Record`] is one listing snapshot scraped from the upstream page; a
//! [`Subscriber`] is a chat that receives alerts for new records.

use serde::{Deserialize, Serialize};

/// A single listing extracted from the source page.
///
/// `car_id` is the identity key used for deduplication. Every other field
/// except `title` and `year` is free text copied verbatim from the page and
/// may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub car_id: String,
    pub title: String,
    pub year: u32,
    pub mileage: Option<String>,
    pub price: Option<String>,
    /// Financing terms.
    pub credit: Option<String>,
    pub fuel: Option<String>,
    pub engine: Option<String>,
    /// Drivetrain.
    pub drive: Option<String>,
    pub power: Option<String>,
    pub transmission: Option<String>,
    /// Body style.
    pub body: Option<String>,
    /// Absolute URL of the detail page.
    pub link: String,
}

impl Record {
    /// Price for display, or a dash when the page did not list one.
    pub fn price_or_dash(&self) -> &str {
        self.price.as_deref().unwrap_or("—")
    }
}

/// A chat registered to receive new-record notifications.
///
/// The id is assigned by the notification transport (a Telegram chat id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: i64,
}

impl Subscriber {
    pub fn new(id: i64) -> Self {
        Self { id }
    }
}
