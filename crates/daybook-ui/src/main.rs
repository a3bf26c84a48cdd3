mod app;
mod components;
mod confirm_dialog;
mod spawn;
mod storage;

use daybook_core::Config;
use wasm_tracing::WasmLayerConfig;
use web_sys::Element;

const BUNDLED_CONFIG: &str = include_str!("../assets/daybook.toml");

/// Mount-element attributes that override bundled configuration keys.
const OVERRIDE_ATTRIBUTES: [(&str, &str); 2] =
  [("data-app-id", "app_id"), ("data-log-level", "log_level")];

fn main() {
  console_error_panic_hook::set_once();

  let mount = web_sys::window()
    .and_then(|window| window.document())
    .and_then(|document| document.get_element_by_id("app"));

  let overrides = mount.as_ref().map(overrides_from).unwrap_or_default();
  let loaded = Config::load(BUNDLED_CONFIG, overrides);

  let level = loaded
    .as_ref()
    .map(Config::level)
    .unwrap_or(tracing::Level::INFO);
  let _ = wasm_tracing::set_as_global_default_with_config(
    WasmLayerConfig::new().set_max_level(level).to_owned()
  );

  tracing::info!("starting Daybook frontend");

  let Some(mount) = mount else {
    tracing::error!("missing #app mount element");
    return;
  };

  let props = match loaded {
    | Ok(config) => app::AppProps {
      config,
      setup_error: None
    },
    | Err(error) => {
      tracing::error!(error = format!("{error:#}"), "configuration rejected");
      app::AppProps {
        config:      Config::default(),
        setup_error: Some(format!("Configuration error: {error:#}"))
      }
    }
  };

  yew::Renderer::<app::App>::with_root_and_props(mount, props).render();
}

fn overrides_from(mount: &Element) -> Vec<(String, String)> {
  OVERRIDE_ATTRIBUTES
    .iter()
    .filter_map(|(attribute, key)| {
      mount
        .get_attribute(attribute)
        .map(|value| (key.to_string(), value))
    })
    .collect()
}
