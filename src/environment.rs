use strum::{Display, EnumString};

/// Runtime environment, selected via the `APP_ENVIRONMENT` variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}
