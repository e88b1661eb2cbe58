use crate::resources::uiplugins::UIPlugin;
use crate::signals::ConfigValue;
use crate::Result;

/// The monitoring plugin as rendered by the metrics chart
pub fn ui_values(plugin: Option<&UIPlugin>) -> Result<Option<ConfigValue>> {
    plugin
        .map(|plugin| ConfigValue::new(plugin, &plugin.spec))
        .transpose()
}
