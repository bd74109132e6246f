mod app;
mod conversation;
mod event;
mod gemini;
mod media;
mod settings;
mod theme;

use std::sync::mpsc;

use app::GemchatApp;
use eframe::egui;
use gemini::GeminiClient;
use settings::Settings;
use theme::Theme;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load();
    let (tx, rx) = mpsc::channel();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("gemchat-runtime")
        .build()?;
    let runtime_handle = runtime.handle().clone();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 700.0])
            .with_min_inner_size([480.0, 360.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Gemchat",
        native_options,
        Box::new(move |creation_context| {
            Theme::default().apply_visuals(&creation_context.egui_ctx);
            let client = GeminiClient::new(
                runtime_handle,
                tx,
                creation_context.egui_ctx.clone(),
                &settings,
            );
            Ok(Box::new(GemchatApp::new(rx, settings, client)))
        }),
    )?;

    // Keep the runtime alive until the window closes; any request still in
    // flight is abandoned with it.
    drop(runtime);
    Ok(())
}
