// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Placeholder substitution in message templates.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::address::AddressRules;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_]+)\}").expect("placeholder pattern is valid"));

/// Recipient fields available to templates.
#[derive(Debug, Clone, Copy)]
pub struct RecipientFields<'a> {
    pub name: &'a str,
    pub address: &'a str,
    pub email: Option<&'a str>,
}

/// Substitutes `{name}`, `{phone}` and `{email}` (and their aliases
/// `{nama}`, `{telepon}`), ignoring case. Unknown placeholders are kept.
pub fn render(template: &str, fields: &RecipientFields<'_>, rules: &AddressRules) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            match caps[1].to_ascii_lowercase().as_str() {
                "name" | "nama" => fields.name.to_string(),
                "phone" | "telepon" => rules.local_form(fields.address),
                "email" => fields.email.unwrap_or_default().to_string(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_config::model::DispatchConfig;

    fn fields() -> RecipientFields<'static> {
        RecipientFields {
            name: "Siti",
            address: "6281234567890",
            email: Some("siti@example.com"),
        }
    }

    fn rules() -> AddressRules {
        AddressRules::from_config(&DispatchConfig::default())
    }

    #[test]
    fn substitutes_known_placeholders() {
        let out = render("Hi {name}, we'll call {phone} or mail {email}.", &fields(), &rules());
        assert_eq!(out, "Hi Siti, we'll call 081234567890 or mail siti@example.com.");
    }

    #[test]
    fn aliases_and_case_are_ignored() {
        let out = render("Halo {NAMA} ({Telepon})", &fields(), &rules());
        assert_eq!(out, "Halo Siti (081234567890)");
    }

    #[test]
    fn unknown_placeholders_stay_verbatim() {
        let out = render("{name}: use code {promo} {  }", &fields(), &rules());
        assert_eq!(out, "Siti: use code {promo} {  }");
    }

    #[test]
    fn missing_email_renders_empty() {
        let f = RecipientFields {
            email: None,
            ..fields()
        };
        assert_eq!(render("[{email}]", &f, &rules()), "[]");
    }
}
