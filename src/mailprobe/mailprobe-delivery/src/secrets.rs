/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

/// Where the secrets of the transports are read from.
pub trait SecretSource {
    /// The value of the secret `name`, `None` if it is not set.
    fn secret(&self, name: &str) -> Option<String>;
}

/// Secrets stored in the environment variables of the current user.
///
/// An empty variable is considered unset.
#[derive(Debug, Default, Clone, Copy)]
pub struct Environment;

impl SecretSource for Environment {
    fn secret(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|value| !value.is_empty())
    }
}

impl<S: std::hash::BuildHasher> SecretSource for std::collections::HashMap<String, String, S> {
    fn secret(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl SecretSource for std::collections::BTreeMap<String, String> {
    fn secret(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::{Environment, SecretSource};

    #[test]
    fn environment() {
        std::env::set_var("MAILPROBE_TEST_SECRET", "hunter2");
        std::env::set_var("MAILPROBE_TEST_EMPTY_SECRET", "");

        assert_eq!(
            Environment.secret("MAILPROBE_TEST_SECRET").as_deref(),
            Some("hunter2")
        );
        assert_eq!(Environment.secret("MAILPROBE_TEST_EMPTY_SECRET"), None);
        assert_eq!(Environment.secret("MAILPROBE_TEST_UNSET_SECRET"), None);
    }

    #[test]
    fn map() {
        let secrets = std::collections::HashMap::from([("a".to_owned(), "b".to_owned())]);
        assert_eq!(secrets.secret("a").as_deref(), Some("b"));
        assert_eq!(secrets.secret("b"), None);
    }
}
