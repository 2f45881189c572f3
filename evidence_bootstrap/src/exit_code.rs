// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Codes
//!
//! The contract is deliberately small: 0 on success, 1 on configuration or
//! fatal runtime error. Kept as an enum so the mapping has one home and
//! the binary stays free of magic numbers.

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Failure = 1,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

/// Maps an application result onto a process exit code, logging the error
/// on the failure path.
pub fn result_to_exit_code<E: std::fmt::Display>(result: Result<(), E>) -> std::process::ExitCode {
    match result {
        Ok(()) => ExitCode::Success.into(),
        Err(err) => {
            tracing::error!("{err}");
            eprintln!("Error: {err}");
            ExitCode::Failure.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_maps_to_zero() {
        assert_eq!(ExitCode::Success as u8, 0);
        assert_eq!(ExitCode::Failure as u8, 1);
    }

    #[test]
    fn test_result_mapping() {
        // std::process::ExitCode has no PartialEq; compare debug renderings.
        let ok: Result<(), String> = Ok(());
        assert_eq!(
            format!("{:?}", result_to_exit_code(ok)),
            format!("{:?}", std::process::ExitCode::from(0))
        );

        let err: Result<(), String> = Err("boom".to_string());
        assert_eq!(
            format!("{:?}", result_to_exit_code(err)),
            format!("{:?}", std::process::ExitCode::from(1))
        );
    }
}
