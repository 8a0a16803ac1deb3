use crate::compositor::{CompositorStats, Signal};
use crate::rendering::{LayoutManager, Viewport};
use crate::widget::Widget;
use crate::{Error, Result};
use image::GrayImage;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

type Reply<T> = oneshot::Sender<Result<T>>;

pub(crate) enum Command {
    ScrollTo(i32, i32, Reply<()>),
    ScrollBy(i32, i32, Reply<()>),
    CenterOn(i32, i32, Reply<()>),
    SetZoom(f32, Reply<f32>),
    ZoomIn(f32, Reply<f32>),
    ZoomOut(f32, Reply<f32>),
    ResetViewport(Reply<()>),
    ConstrainViewport(Reply<()>),
    GetViewport(Reply<Viewport>),
    SetVisibility(Arc<dyn Widget>, bool, Reply<bool>),
    Snapshot(bool, Reply<GrayImage>),
    Stats(Reply<CompositorStats>),
}

impl Command {
    /// Runs on the render thread between ticks.
    pub(crate) fn execute<F>(self, layout: &Mutex<LayoutManager>, stats: F)
    where
        F: FnOnce() -> CompositorStats,
    {
        let mut layout = layout.lock().unwrap_or_else(|p| p.into_inner());
        match self {
            Command::ScrollTo(x, y, resp) => {
                let res = with_viewport(&mut layout, |vp| vp.scroll_to(x, y));
                let _ = resp.send(res);
            }
            Command::ScrollBy(dx, dy, resp) => {
                let res = with_viewport(&mut layout, |vp| vp.scroll_by(dx, dy));
                let _ = resp.send(res);
            }
            Command::CenterOn(x, y, resp) => {
                let res = with_viewport(&mut layout, |vp| vp.center_on(x, y));
                let _ = resp.send(res);
            }
            Command::SetZoom(z, resp) => {
                let res = with_viewport(&mut layout, |vp| {
                    vp.set_zoom(z);
                    vp.zoom()
                });
                let _ = resp.send(res);
            }
            Command::ZoomIn(step, resp) => {
                let res = with_viewport(&mut layout, |vp| {
                    vp.zoom_in(step);
                    vp.zoom()
                });
                let _ = resp.send(res);
            }
            Command::ZoomOut(step, resp) => {
                let res = with_viewport(&mut layout, |vp| {
                    vp.zoom_out(step);
                    vp.zoom()
                });
                let _ = resp.send(res);
            }
            Command::ResetViewport(resp) => {
                let res = with_viewport(&mut layout, |vp| vp.reset());
                let _ = resp.send(res);
            }
            Command::ConstrainViewport(resp) => {
                let res = if layout.is_viewport_mode() {
                    layout.constrain_viewport();
                    Ok(())
                } else {
                    Err(Error::NoViewport)
                };
                let _ = resp.send(res);
            }
            Command::GetViewport(resp) => {
                let res = with_viewport(&mut layout, |vp| *vp);
                let _ = resp.send(res);
            }
            Command::SetVisibility(widget, visible, resp) => {
                let found = layout.set_widget_visibility(&widget, visible);
                let _ = resp.send(Ok(found));
            }
            Command::Snapshot(apply_viewport, resp) => {
                let _ = resp.send(Ok(layout.composite(apply_viewport)));
            }
            Command::Stats(resp) => {
                let _ = resp.send(Ok(stats()));
            }
        }
    }
}

fn with_viewport<T>(layout: &mut LayoutManager, f: impl FnOnce(&mut Viewport) -> T) -> Result<T> {
    if !layout.is_viewport_mode() {
        return Err(Error::NoViewport);
    }
    layout.viewport_mut().map(f).ok_or(Error::NoViewport)
}

/// An async-friendly handle onto a running compositor.
///
/// Every request is queued to the render thread and executed there between
/// ticks, so layout and viewport mutation never races a frame in progress.
/// Requests fail with [`Error::NotRunning`] once the loop it was obtained
/// from has stopped.
#[derive(Clone)]
pub struct DisplayHandle {
    signal_tx: Sender<Signal>,
}

impl DisplayHandle {
    pub(crate) fn new(signal_tx: Sender<Signal>) -> Self {
        Self { signal_tx }
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.signal_tx
            .send(Signal::Command(make(tx)))
            .map_err(|_| Error::NotRunning)?;
        rx.await.map_err(|_| Error::NotRunning)?
    }

    pub async fn scroll_to(&self, x: i32, y: i32) -> Result<()> {
        self.request(|tx| Command::ScrollTo(x, y, tx)).await
    }

    pub async fn scroll_by(&self, dx: i32, dy: i32) -> Result<()> {
        self.request(|tx| Command::ScrollBy(dx, dy, tx)).await
    }

    pub async fn center_on(&self, x: i32, y: i32) -> Result<()> {
        self.request(|tx| Command::CenterOn(x, y, tx)).await
    }

    /// Returns the zoom actually applied after clamping
    pub async fn set_zoom(&self, zoom: f32) -> Result<f32> {
        self.request(|tx| Command::SetZoom(zoom, tx)).await
    }

    pub async fn zoom_in(&self, step: f32) -> Result<f32> {
        self.request(|tx| Command::ZoomIn(step, tx)).await
    }

    pub async fn zoom_out(&self, step: f32) -> Result<f32> {
        self.request(|tx| Command::ZoomOut(step, tx)).await
    }

    pub async fn reset_viewport(&self) -> Result<()> {
        self.request(Command::ResetViewport).await
    }

    pub async fn constrain_viewport(&self) -> Result<()> {
        self.request(Command::ConstrainViewport).await
    }

    pub async fn viewport(&self) -> Result<Viewport> {
        self.request(Command::GetViewport).await
    }

    /// Returns whether the widget is attached to the layout
    pub async fn set_visibility(&self, widget: Arc<dyn Widget>, visible: bool) -> Result<bool> {
        self.request(|tx| Command::SetVisibility(widget, visible, tx))
            .await
    }

    /// Composite a frame on the render thread without sending it
    pub async fn snapshot(&self, apply_viewport: bool) -> Result<GrayImage> {
        self.request(|tx| Command::Snapshot(apply_viewport, tx)).await
    }

    pub async fn stats(&self) -> Result<CompositorStats> {
        self.request(Command::Stats).await
    }
}
