use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use std::collections::BTreeMap;

/// Label binding a workload's pods to the service selecting them.
pub const APP_LABEL: &str = "app";

macro_rules! string_map {
    ($name:ident) => {
        #[derive(Clone, Debug, Default, PartialEq, Eq)]
        pub struct $name(pub BTreeMap<String, String>);

        impl $name {
            pub fn new() -> Self {
                Self(BTreeMap::new())
            }

            pub fn insert(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
                self.0.insert(key.into(), value.into());
                self
            }

            /// `None` when empty, so unset maps are omitted from the payload.
            pub fn into_option(self) -> Option<BTreeMap<String, String>> {
                if self.0.is_empty() {
                    None
                } else {
                    Some(self.0)
                }
            }
        }
    };
}

string_map!(Labels);
string_map!(Annotations);

impl Labels {
    pub fn app(name: impl Into<String>) -> Self {
        Self::new().insert(APP_LABEL, name)
    }

    pub fn selector(self) -> LabelSelector {
        LabelSelector {
            match_labels: self.into_option(),
            match_expressions: None,
        }
    }
}
