pub use self::glob::GlobPattern;

pub mod glob {
    use std::ops::Deref;
    use std::path::Path;

    use ::glob::PatternError;
    use ::serde::{
        de::{self, Visitor},
        Deserialize, Serialize,
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct GlobPattern(::glob::Pattern);

    impl GlobPattern {
        pub fn parse(pattern: &str) -> Result<Self, PatternError> {
            ::glob::Pattern::new(pattern).map(Self)
        }

        /// Matches only the last component of `path`.
        pub fn matches_file_name(&self, path: impl AsRef<Path>) -> bool {
            path.as_ref()
                .file_name()
                .map(|name| self.0.matches(&name.to_string_lossy()))
                .unwrap_or(false)
        }
    }

    impl Deref for GlobPattern {
        type Target = ::glob::Pattern;

        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }

    impl std::fmt::Display for GlobPattern {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str(self.0.as_str())
        }
    }

    impl Serialize for GlobPattern {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            serializer.serialize_str(self.0.as_str())
        }
    }

    impl<'de> Deserialize<'de> for GlobPattern {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            struct GlobPatternVisitor;

            impl<'de> Visitor<'de> for GlobPatternVisitor {
                type Value = GlobPattern;

                fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                    write!(f, "a glob pattern string")
                }

                fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Self::Value::parse(v).map_err(de::Error::custom)
                }
            }

            deserializer.deserialize_str(GlobPatternVisitor)
        }
    }

}

/// `Duration` as a human readable string such as `"2s"`, `"1500ms"` or `"1m"`.
/// A bare integer is read as milliseconds.
///
/// ```
/// use std::time::Duration;
///
/// #[derive(serde::Deserialize)]
/// struct Limits {
///     #[serde(with = "serdable::duration")]
///     time_limit: Duration,
/// }
///
/// let x: Limits = toml::from_str(r#"time_limit = "2s""#).unwrap();
/// assert_eq!(x.time_limit, Duration::from_secs(2));
/// ```
pub mod duration {
    use std::time::Duration;

    use serde::{
        de::{self, Visitor},
        Deserializer, Serializer,
    };

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum ParseDurationError {
        #[error("Empty duration string")]
        Empty,

        #[error("Invalid number in duration '{0}'")]
        InvalidNumber(String),

        #[error("Unknown duration unit '{0}' (expected one of: ms, s, m)")]
        UnknownUnit(String),
    }

    pub fn parse(s: &str) -> Result<Duration, ParseDurationError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseDurationError::Empty);
        }
        let split_at = s
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(s.len());
        let (num, unit) = s.split_at(split_at);

        let num: f64 = num
            .parse()
            .map_err(|_| ParseDurationError::InvalidNumber(s.to_owned()))?;
        let millis = match unit.trim() {
            "" | "ms" => num,
            "s" => num * 1000.0,
            "m" | "min" => num * 60_000.0,
            unit => return Err(ParseDurationError::UnknownUnit(unit.to_owned())),
        };
        Ok(Duration::from_micros((millis * 1000.0).round() as u64))
    }

    pub fn format(d: Duration) -> String {
        let ms = d.as_millis();
        if ms % 1000 == 0 && ms > 0 {
            format!("{}s", ms / 1000)
        } else {
            format!("{}ms", ms)
        }
    }

    pub fn serialize<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(*d))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DurationVisitor;

        impl<'de> Visitor<'de> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "a duration like \"2s\" or an integer of milliseconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Duration::from_millis(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(v)
                    .map(Duration::from_millis)
                    .map_err(|_| de::Error::custom("duration must not be negative"))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                parse(v).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }

}
