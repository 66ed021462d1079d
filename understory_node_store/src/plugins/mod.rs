// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Built-in plugins.

mod attachments;
mod validation;

pub use attachments::{Attachment, AttachmentsPlugin};
pub use validation::{Severity, Validation, ValidationPlugin};
