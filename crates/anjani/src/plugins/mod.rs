//! Built-in plugins, registered in list order.

use std::sync::Arc;

use anjani_core::plugin::Plugin;

mod ping;
mod staff;

pub fn builtin() -> Vec<Arc<dyn Plugin>> {
    vec![Arc::new(ping::Ping), Arc::new(staff::Staff)]
}
