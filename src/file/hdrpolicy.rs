//! Index of the file header's named policies with per-policy use
//! counts.  Derived state: rebuilt whole whenever the header list or any
//! record's policy reference changes.

use std::collections::BTreeMap;

use crate::file::policy::PasswdPolicy;

#[derive(Debug, Clone)]
struct HdrPolicy {
    policy: PasswdPolicy,
    use_count: usize,
}

/// Named header policies, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct HeaderPolicies {
    policies: BTreeMap<String, HdrPolicy>,
}

impl HeaderPolicies {
    /// Build from the header's policy list and the policy names the
    /// records reference.  References to names missing from the header
    /// are not indexed.
    pub fn new<'a, I>(policies: Vec<PasswdPolicy>, used_names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut map = BTreeMap::new();
        for policy in policies {
            map.insert(
                policy.name().to_owned(),
                HdrPolicy {
                    policy,
                    use_count: 0,
                },
            );
        }
        let mut index = Self { policies: map };
        for name in used_names {
            if let Some(hdr) = index.policies.get_mut(name) {
                hdr.use_count += 1;
            }
        }
        index
    }

    pub fn get(&self, name: &str) -> Option<&PasswdPolicy> {
        self.policies.get(name).map(|hdr| &hdr.policy)
    }

    /// How many records reference the named policy; `None` when the
    /// name is not in the header.
    pub fn use_count(&self, name: &str) -> Option<usize> {
        self.policies.get(name).map(|hdr| hdr.use_count)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.policies.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Policies in name order with their use counts.
    pub fn iter(&self) -> impl Iterator<Item = (&PasswdPolicy, usize)> {
        self.policies.values().map(|hdr| (&hdr.policy, hdr.use_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::policy::Location;

    #[test]
    fn counts_record_references() {
        let policies = vec![
            PasswdPolicy::new("Login", Location::Header),
            PasswdPolicy::new("Wifi", Location::Header),
        ];
        let used = ["Login", "Login", "NoSuch"];
        let index = HeaderPolicies::new(policies, used);

        assert_eq!(index.use_count("Login"), Some(2));
        assert_eq!(index.use_count("Wifi"), Some(0));
        assert_eq!(index.use_count("NoSuch"), None);
        assert!(index.get("Wifi").is_some());
        assert_eq!(index.len(), 2);
    }
}
