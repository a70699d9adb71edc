use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("Expected `shard.realm.num`, got `{0}`")]
    Format(String),
    #[error("Invalid number `{part}` in `{input}`")]
    Number { input: String, part: String },
}

/// `shard.realm.num` triple shared by every ledger entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

impl EntityId {
    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        let [shard, realm, num] = parts.as_slice() else {
            return Err(IdParseError::Format(s.to_owned()));
        };
        let parse = |part: &str| {
            part.parse::<u64>().map_err(|_| IdParseError::Number {
                input: s.to_owned(),
                part: part.to_owned(),
            })
        };
        Ok(Self::new(parse(shard)?, parse(realm)?, parse(num)?))
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub EntityId);

        impl $name {
            pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
                Self(EntityId::new(shard, realm, num))
            }

            pub const fn num(&self) -> u64 {
                self.0.num
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

entity_id!(
    /// Names an account on the ledger.
    AccountId
);
entity_id!(
    /// Names a fungible token type.
    TokenId
);
entity_id!(
    /// Names a consensus topic.
    TopicId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let id: AccountId = "0.0.1001".parse().unwrap();
        assert_eq!(id, AccountId::new(0, 0, 1001));
        assert_eq!(id.to_string(), "0.0.1001");
        assert_eq!(id.num(), 1001);
    }

    #[test]
    fn reject_malformed_ids() {
        assert_eq!(
            "0.1001".parse::<TokenId>().unwrap_err(),
            IdParseError::Format("0.1001".to_owned())
        );
        let err = "0.0.x".parse::<TopicId>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid number `x` in `0.0.x`");
    }
}
