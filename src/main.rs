use flow_pad::flow_utils::state::FlowState;
use flow_pad::gui::frontend::FlowApp;
use flow_pad::persistence::persist;
use flow_pad::persistence::settings::AppSettings;

use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let settings = AppSettings::load().unwrap_or_default();
    // Pin the autosave location for the lifetime of the process
    persist::set_settings_override(settings.clone());

    // Missing or unreadable board slots start an empty board
    let nodes = persist::load_nodes();
    let edges = persist::load_edges();
    let state = FlowState::from_parts(nodes, edges);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 680.0])
            // Provide sensible bounds so the UI stays usable on small screens
            .with_min_inner_size([640.0, 400.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "Flow-Pad",
        options,
        Box::new(move |_cc| Ok(Box::new(FlowApp::new(state, settings)) as Box<dyn eframe::App>)),
    )
}
