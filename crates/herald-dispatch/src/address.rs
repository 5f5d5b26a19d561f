// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recipient address normalisation.

use herald_config::model::DispatchConfig;

/// National numbering rules used to turn free-form phone numbers into
/// international addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRules {
    country_code: String,
    mobile_prefix: String,
    min_subscriber_digits: usize,
    max_subscriber_digits: usize,
}

impl AddressRules {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            country_code: config.country_code.clone(),
            mobile_prefix: config.mobile_prefix.clone(),
            min_subscriber_digits: config.min_subscriber_digits,
            max_subscriber_digits: config.max_subscriber_digits,
        }
    }

    /// Strips everything but digits, replaces a leading trunk `0` with the
    /// country code and prefixes the country code when it is missing.
    pub fn normalize(&self, raw: &str) -> String {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if let Some(local) = digits.strip_prefix('0') {
            format!("{}{local}", self.country_code)
        } else if digits.starts_with(&self.country_code) {
            digits
        } else {
            format!("{}{digits}", self.country_code)
        }
    }

    /// Whether a normalised address is a mobile number of acceptable length.
    pub fn is_valid(&self, address: &str) -> bool {
        if address.is_empty() || !address.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        let Some(subscriber) = address.strip_prefix(&self.country_code) else {
            return false;
        };
        subscriber.starts_with(&self.mobile_prefix)
            && (self.min_subscriber_digits..=self.max_subscriber_digits).contains(&subscriber.len())
    }

    /// Normalises and validates in one step.
    pub fn parse(&self, raw: &str) -> Option<String> {
        let address = self.normalize(raw);
        self.is_valid(&address).then_some(address)
    }

    /// The national form of an address, with the trunk `0` restored.
    pub fn local_form(&self, address: &str) -> String {
        match address.strip_prefix(&self.country_code) {
            Some(subscriber) => format!("0{subscriber}"),
            None => address.to_string(),
        }
    }
}
