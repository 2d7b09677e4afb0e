//! Shared UI icons.
//!
//! Each icon falls back to a plain-text marker on terminals without emoji support.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[WARN]");

// Workflow steps
pub static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
pub static SYNC: Emoji<'_, '_> = Emoji("🔄 ", "[SYNC]");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "[SUBMIT]");
pub static SCRIPT: Emoji<'_, '_> = Emoji("📝 ", "[GEN]");
pub static PLAN: Emoji<'_, '_> = Emoji("🔍 ", "[DRY]");
