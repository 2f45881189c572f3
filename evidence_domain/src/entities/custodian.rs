// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Custodian
//!
//! The natural party responsible for an evidence item, typically a mailbox
//! owner. Identified by a stable business key (conventionally the email
//! local-part); upserted by the metadata store on first sighting and kept
//! for the lifetime of the case.

use serde::{Deserialize, Serialize};

/// Custodian of one or more evidence documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Custodian {
    identifier: String,
    display_name: Option<String>,
    email: Option<String>,
}

impl Custodian {
    /// Creates a custodian from an explicit business key.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: None,
            email: None,
        }
    }

    /// Derives a custodian from an email address: the identifier is the
    /// lowercased local-part and the display name a title-cased rendering
    /// of it (`jeff.skilling` becomes `Jeff Skilling`).
    pub fn from_email(email: &str) -> Self {
        let email = email.trim().to_lowercase();
        let identifier = email.split('@').next().unwrap_or("unknown").to_string();
        let display_name = identifier
            .split(['.', '_'])
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            identifier,
            display_name: Some(display_name),
            email: Some(email),
        }
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Sets the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}
