//! Fuzz target: configuration document load and update
//!
//! Feeds arbitrary text to a configured controller, first as a stored
//! document and then as an operator update.  The controller must never
//! panic, and a rejected update must leave the relay bank unchanged.
//!
//! cargo fuzz run fuzz_config_document

#![no_main]

use libfuzzer_sys::fuzz_target;
use poolcontrol::adapters::config_store::MemoryConfigStore;
use poolcontrol::app::commands::AppCommand;
use poolcontrol::app::events::AppEvent;
use poolcontrol::app::ports::EventSink;
use poolcontrol::app::service::PoolController;
use poolcontrol::config::ControllerConfig;
use poolcontrol::document::ConfigDocument;

struct Discard;

impl EventSink for Discard {
    fn emit(&mut self, _event: &AppEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let mut store = MemoryConfigStore::with_document(text);
    let mut app = PoolController::new(ControllerConfig::default());
    app.start(&mut Discard);
    app.load_config(0, &mut store, &mut Discard);

    let Ok(doc) = ConfigDocument::from_json(text) else {
        return;
    };
    let before = app.relay_views();
    if app
        .handle_command(AppCommand::UpdateConfig(doc), 0, &mut store, &mut Discard)
        .is_err()
    {
        assert_eq!(app.relay_views(), before, "rejected update modified relays");
    }
});
