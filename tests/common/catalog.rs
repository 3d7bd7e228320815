//! Catalog fixtures.

use std::sync::Arc;
use superfeed::{Catalog, ChannelAccessResolver, Config};

/// A small state-level catalog: one premium MP channel with related
/// channels, a stand-alone premium channel, and a hierarchy directory.
pub const SAMPLE_CATALOG: &str = r#"
[channels.pune_mp]
is_premium = true
is_public = true
is_realtime = true

[channels.pune_mp.tenant_connection]
url = "https://pune.tenant.example"
anon_key = "pune-anon"

[[channels.pune_mp.related_channels]]
username = "kothrud_mla"

[[channels.pune_mp.related_channels]]
username = "alice"
is_premium = true

[[channels.pune_mp.related_channels]]
username = "bob"

[[channels.pune_mp.related_channels]]
username = "aundh_mla"
is_public = true

[channels.pune_mp.related_channels.tenant_connection]
url = "https://aundh.tenant.example"
anon_key = "aundh-anon"

[[channels.pune_mp.products]]
id = "monthly"
title = "Monthly supporter"
price = 9900

[channels.pune_mp.onboarding]
finish_rpc = "finish_pune_onboarding"

[[channels.pune_mp.onboarding.screens]]
id = "about"
title = "About you"

[[channels.pune_mp.onboarding.screens.fields]]
id = "ward"
label = "Ward"
type = "select"
options = ["Kothrud", "Aundh"]
required = true

[[channels.pune_mp.onboarding.screens.fields]]
id = "consent"
label = "I agree to the channel rules"
type = "boolean"
required = true

[channels.bob]
is_premium = true

[[hierarchy]]
name = "Maharashtra"
kind = "state"

[[hierarchy.children]]
name = "Pune"
kind = "district"

[[hierarchy.children.members]]
username = "pune_mp"
is_realtime = true

[[hierarchy.children.members]]
username = "kothrud_mla"

[[hierarchy.children.members]]
username = "hadapsar_ward"
"#;

pub fn sample_config() -> Config {
    toml::from_str(SAMPLE_CATALOG).expect("sample catalog parses")
}

pub fn sample_resolver() -> ChannelAccessResolver {
    ChannelAccessResolver::new(Arc::new(Catalog::from_config(&sample_config())))
}
