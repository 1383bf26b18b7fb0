//! Text-backed status and kind enums.
//!
//! Each enum is stored as a `TEXT` column constrained by a `CHECK` in the
//! migrations, and serialized with the same snake_case value over JSON.

/// Error returned when a stored or submitted value matches no variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! define_text_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $val)] $variant ),+
        }

        impl $name {
            /// Every variant in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the stored text value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $val ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $val => Ok($name::$variant), )+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <&str as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let text = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                Ok(text.parse::<$name>()?)
            }
        }
    };
}

define_text_enum! {
    /// Background job lifecycle status.
    JobStatus {
        Queued = "queued",
        Processing = "processing",
        Completed = "completed",
        Failed = "failed",
        Cancelled = "cancelled",
    }
}

define_text_enum! {
    /// Kind of work a job performs; selects the worker processor.
    JobType {
        SceneDetection = "scene_detection",
        PreviewGeneration = "preview_generation",
        ThumbnailExtraction = "thumbnail_extraction",
    }
}

define_text_enum! {
    /// Aggregate video status, mirroring its most recent job transition.
    VideoStatus {
        Uploaded = "uploaded",
        Queued = "queued",
        Processing = "processing",
        Completed = "completed",
        Failed = "failed",
        Cancelled = "cancelled",
    }
}

/// Statuses from which a job may be cancelled.
pub const CANCELLABLE_STATUSES: [JobStatus; 2] = [JobStatus::Queued, JobStatus::Processing];

impl JobStatus {
    /// `completed`, `failed` and `cancelled` end a lifecycle instance.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// `queued` and `processing` make up the active lifecycle instance.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    pub fn can_cancel(self) -> bool {
        CANCELLABLE_STATUSES.contains(&self)
    }

    pub fn can_retry(self) -> bool {
        self == Self::Failed
    }
}

impl From<JobStatus> for VideoStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Queued => VideoStatus::Queued,
            JobStatus::Processing => VideoStatus::Processing,
            JobStatus::Completed => VideoStatus::Completed,
            JobStatus::Failed => VideoStatus::Failed,
            JobStatus::Cancelled => VideoStatus::Cancelled,
        }
    }
}
