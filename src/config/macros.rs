/// Configuration macros for zero-repetition config definitions
///
/// Provides the `config_struct!` macro for defining configuration structures
/// with embedded defaults in a single declaration.

/// Define a configuration struct with embedded defaults
///
/// Each field is declared once with its name, type and default value, and the
/// macro generates:
/// - The struct with public fields
/// - The Default implementation
/// - Serde serialization/deserialization with `#[serde(default)]`
///
/// # Example
/// ```
/// use missionsync::config_struct;
///
/// config_struct! {
///     pub struct RetryConfig {
///         max_attempts: u32 = 5,
///         base_delay_ms: u64 = 1000,
///     }
/// }
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
