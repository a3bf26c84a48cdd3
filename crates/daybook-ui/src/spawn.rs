use futures::future::LocalFutureObj;
use futures::task::{
  LocalSpawn,
  SpawnError
};

/// Runs workspace futures on the browser microtask queue.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
  fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
    wasm_bindgen_futures::spawn_local(future);
    Ok(())
  }
}
