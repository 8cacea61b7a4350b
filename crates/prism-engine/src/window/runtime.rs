use anyhow::{Context, Result, anyhow};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::time::FrameClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "prism".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window and redraws it continuously until the app exits, the window
    /// closes or the GPU device is lost.
    ///
    /// Startup failures and device loss are returned as errors.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + App,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        state.error.map_or(Ok(()), Err)
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<A: App> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    entry: Option<WindowEntry>,
    started: bool,
    finished: bool,
    error: Option<anyhow::Error>,
}

impl<A: App> AppState<A> {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            entry: None,
            started: false,
            finished: false,
            error: None,
        }
    }

    fn open_window(&self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        WindowEntryTryBuilder {
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed for window")
    }

    /// Calls `on_exit` once while the GPU is still alive, then drops the window.
    fn finish(&mut self, event_loop: &ActiveEventLoop) {
        if !self.finished {
            self.finished = true;
            if self.started {
                self.app.on_exit();
            }
            self.entry = None;
        }
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error.get_or_insert(err);
        self.finish(event_loop);
    }

    /// Drives `f` with a fresh `FrameCtx`; returns the app's directive.
    fn with_frame_ctx<F>(&mut self, f: F) -> AppControl
    where
        F: FnOnce(&mut A, &mut FrameCtx<'_, '_>) -> AppControl,
    {
        let (app, Some(entry)) = (&mut self.app, self.entry.as_mut()) else {
            return AppControl::Continue;
        };

        entry.with_mut(|fields| {
            let time = fields.clock.tick();
            let mut ctx = FrameCtx {
                window: WindowCtx {
                    id: fields.window.id(),
                    window: fields.window,
                },
                gpu: fields.gpu,
                time,
            };
            f(app, &mut ctx)
        })
    }

    fn resize(&mut self, size: Option<PhysicalSize<u32>>) {
        if let Some(entry) = self.entry.as_mut() {
            let size = size.unwrap_or_else(|| entry.with_window(|w| w.inner_size()));
            entry.with_gpu_mut(|gpu| gpu.resize(size));
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(entry) = self.entry.as_ref() else {
            return;
        };

        if let Some(reason) = entry.with_gpu(|gpu| gpu.health().lost_reason()) {
            self.fail(event_loop, anyhow!("GPU device lost: {reason}"));
            return;
        }

        let minimized = entry.with_gpu(|gpu| gpu.size().width == 0 || gpu.size().height == 0);
        if minimized {
            return;
        }

        if self.with_frame_ctx(|app, ctx| app.on_frame(ctx)) == AppControl::Exit {
            self.finish(event_loop);
        }
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.finished {
            return;
        }

        match self.open_window(event_loop) {
            Ok(entry) => self.entry = Some(entry),
            Err(err) => {
                self.fail(event_loop, err);
                return;
            }
        }

        if !self.started {
            self.started = true;
            if self.with_frame_ctx(|app, ctx| app.on_start(ctx)) == AppControl::Exit {
                self.finish(event_loop);
                return;
            }
        }

        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.finished {
            event_loop.exit();
            return;
        }

        // Continuous redraw: the tracer re-dispatches every frame.
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.finished {
            event_loop.exit();
            return;
        }

        if self.app.on_window_event(window_id, &event) == AppControl::Exit {
            self.finish(event_loop);
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.finish(event_loop),
            WindowEvent::Resized(size) => self.resize(Some(size)),
            WindowEvent::ScaleFactorChanged { .. } => self.resize(None),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn exiting(&mut self, event_loop: &ActiveEventLoop) {
        self.finish(event_loop);
        log::debug!("runtime exiting");
    }
}
