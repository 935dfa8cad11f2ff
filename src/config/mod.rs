mod settings;

pub use settings::{
    EmptyChannelPolicy, LivenessConfig, RouterConfig, Settings, DEFAULT_CONFIG_FILE, ENV_PREFIX,
};
