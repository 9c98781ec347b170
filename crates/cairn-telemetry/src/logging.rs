// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logger bootstrap for applications embedding a content manager.
//!
//! The library crates only talk to the `log` facade; installing a logger is the
//! host application's call.

use env_logger::{Builder, Env};

/// Installs an `env_logger` that honours `RUST_LOG` and falls back to
/// `default_filter` (for example `"info"` or `"cairn_io=debug"`).
///
/// Returns `false` if a global logger was already installed, which makes it safe
/// to call from several tests.
pub fn init_logging(default_filter: &str) -> bool {
    Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}
