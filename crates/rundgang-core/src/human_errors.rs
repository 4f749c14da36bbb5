// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for inspectors in the field.
//
// Every technical error is mapped to plain English with a clear next step.
// Severity drives how the message is presented (notice vs. blocking prompt).

use crate::error::{DispatchStage, RundgangError};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip, timeout. Trying again will probably work.
    Transient,
    /// The inspector must do something first (sign in, take a photo).
    ActionRequired,
    /// Retrying won't help: damaged photo, broken configuration.
    Permanent,
}

/// A human-readable error with a plain English message and suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether the same operation can simply be repeated.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `RundgangError` into a `HumanError`.
pub fn humanize_error(err: &RundgangError) -> HumanError {
    match err {
        RundgangError::Capture(_) => HumanError {
            message: "The photo couldn't be taken.".into(),
            suggestion: "Make sure the camera is available and not used by another app, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        RundgangError::IndexOutOfRange { .. } => HumanError {
            message: "That photo is no longer in the list.".into(),
            suggestion: "The list may have changed. Pick the photo again from the current list.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        RundgangError::UnknownField(field) => HumanError {
            message: "That detail can't be changed.".into(),
            suggestion: format!("Only type, condition and floor can be edited after capture. ({field})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        RundgangError::InvalidFieldValue { field, value } => HumanError {
            message: "That value isn't one of the choices.".into(),
            suggestion: format!("Pick a value from the list for {field} (got \"{value}\")."),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        RundgangError::InvalidFloor(_) => HumanError {
            message: "That floor doesn't exist.".into(),
            suggestion: "Choose a floor between 1 and 50.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        RundgangError::Decode(_) => HumanError {
            message: "There's a problem with one of the photos.".into(),
            suggestion: "The photo may be damaged. Remove it and take it again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        RundgangError::Composition { at_index, .. } => HumanError {
            message: "The report couldn't be put together.".into(),
            suggestion: format!(
                "Photo number {} can't be read. Remove it and take it again, then send the report.",
                at_index + 1
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        RundgangError::Pdf(_) => HumanError {
            message: "The report file couldn't be created.".into(),
            suggestion: "Try again. If this keeps happening, save the photos as an archive instead.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        RundgangError::Enrichment(_) => HumanError {
            message: "The address for this location couldn't be found.".into(),
            suggestion: "The report will show the coordinates only. You can continue as normal.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        RundgangError::Auth(_) => HumanError {
            message: "You need to sign in again.".into(),
            suggestion: "Your sign-in is missing or has expired. Sign in, then send the report again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        RundgangError::Dispatch { stage, detail } => humanize_dispatch_error(*stage, detail),

        RundgangError::EmptyExport => HumanError {
            message: "There's nothing to send yet.".into(),
            suggestion: "Take at least one photo, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        RundgangError::ExportInProgress => HumanError {
            message: "The report is already being sent.".into(),
            suggestion: "Wait for the current export to finish.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        RundgangError::Config(detail) => HumanError {
            message: "The app settings aren't valid.".into(),
            suggestion: format!("Check the configuration file. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        RundgangError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "A file couldn't be found.".into(),
                suggestion: "It may have been moved or deleted. Check the path and try again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "The app isn't allowed to write there.".into(),
                suggestion: "Choose a different export folder, or check its permissions.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, your device's storage may be full.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        RundgangError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

/// Turn a dispatch failure into a message the user can act on.
fn humanize_dispatch_error(stage: DispatchStage, detail: &str) -> HumanError {
    match stage {
        DispatchStage::NotSent => HumanError {
            message: "The mail service couldn't be reached.".into(),
            suggestion: "Check your internet connection, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
        DispatchStage::InFlight => HumanError {
            message: "The mail service didn't respond in time.".into(),
            suggestion: "The report may already have been delivered. Check with the recipient before sending it again.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },
        DispatchStage::Status(401 | 403) => HumanError {
            message: "The mail service rejected your sign-in.".into(),
            suggestion: "Sign in again, then send the report again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        DispatchStage::Status(413) => HumanError {
            message: "The report is too large to send by mail.".into(),
            suggestion: "Remove some photos, or export the report as a file instead.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        DispatchStage::Status(429 | 500..=599) => HumanError {
            message: "The mail service is busy.".into(),
            suggestion: "Wait a minute, then try again. Your photos are still here.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
        DispatchStage::Status(_) => HumanError {
            message: "The mail service refused the report.".into(),
            suggestion: format!("Check the mail settings in the configuration file. (Detail: {detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },
        DispatchStage::Local => HumanError {
            message: "The report couldn't be exported.".into(),
            suggestion: format!("Try again. Your photos are still here. (Detail: {detail})"),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failure_requires_action() {
        let human = humanize_error(&RundgangError::Auth("token expired".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn unreachable_service_is_transient() {
        let err = RundgangError::dispatch(DispatchStage::NotSent, "connection refused");
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn timeout_warns_about_a_possible_duplicate() {
        let human = humanize_error(&RundgangError::dispatch(DispatchStage::InFlight, "timed out"));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("already have been delivered"));
    }

    #[test]
    fn status_drives_the_message_not_the_body() {
        let rejected = RundgangError::dispatch(DispatchStage::Status(400), "upstream request timed out");
        assert_eq!(humanize_error(&rejected).severity, Severity::Permanent);

        let busy = RundgangError::dispatch(DispatchStage::Status(503), "invalid token");
        assert_eq!(humanize_error(&busy).severity, Severity::Transient);
    }

    #[test]
    fn composition_names_the_photo() {
        let err = RundgangError::composition(2, RundgangError::Decode("bad jpeg".into()));
        let human = humanize_error(&err);
        assert!(human.suggestion.contains("Photo number 3"));
    }

    #[test]
    fn empty_export_is_action_required() {
        let human = humanize_error(&RundgangError::EmptyExport);
        assert_eq!(human.severity, Severity::ActionRequired);
    }
}
