//! The meme component: props, loader and render surface wired together.

use crate::export::{ExportHandle, Snapshot};
use crate::loader::ImageLoader;
use crate::render::render_svg;
use crate::source::{DefaultResolver, ImageResolver};
use crate::{
    Attribution, CaptionPair, DeviceClass, DisplaySize, Error, LoadState, MemeConfig, Result,
};
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Inputs supplied by the embedder
#[derive(Debug, Clone, Default)]
pub struct MemeProps {
    /// Image locator (required, non-empty)
    pub image_source: String,
    pub top_label: String,
    pub bottom_label: String,
    pub device_class: DeviceClass,
    /// Where rendered frames are published for capture
    pub export_handle: Option<ExportHandle>,
}

impl MemeProps {
    pub fn new(image_source: impl Into<String>) -> Self {
        Self {
            image_source: image_source.into(),
            ..Default::default()
        }
    }

    pub fn top_label(mut self, text: impl Into<String>) -> Self {
        self.top_label = text.into();
        self
    }

    pub fn bottom_label(mut self, text: impl Into<String>) -> Self {
        self.bottom_label = text.into();
        self
    }

    pub fn device_class(mut self, device: DeviceClass) -> Self {
        self.device_class = device;
        self
    }

    pub fn export_handle(mut self, handle: ExportHandle) -> Self {
        self.export_handle = Some(handle);
        self
    }

    pub fn captions(&self) -> CaptionPair {
        CaptionPair::new(self.top_label.clone(), self.bottom_label.clone())
    }
}

type ReadyHandler = Box<dyn Fn() + Send + Sync>;
type ErrorHandler = Box<dyn Fn(&Error) + Send + Sync>;

/// Builder for a [`Meme`] whose handlers must be in place before the first
/// resolution starts.
pub struct MemeBuilder {
    props: MemeProps,
    config: MemeConfig,
    resolver: Option<Arc<dyn ImageResolver>>,
    on_ready: Option<ReadyHandler>,
    on_error: Option<ErrorHandler>,
}

impl MemeBuilder {
    pub fn config(mut self, config: MemeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ImageResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn on_ready<F>(mut self, cb: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_ready = Some(Box::new(cb));
        self
    }

    pub fn on_error<F>(mut self, cb: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(cb));
        self
    }

    /// Build the component and start resolving its image.
    pub fn build(self) -> Result<Meme> {
        if self.props.image_source.trim().is_empty() {
            return Err(Error::ConfigError("image source must not be empty".to_string()));
        }

        let resolver = match self.resolver {
            Some(r) => r,
            None => Arc::new(DefaultResolver::new(self.config.clone())?),
        };
        let props = Arc::new(Mutex::new(self.props));
        let loader = ImageLoader::new(resolver);

        // refresh the export handle with the sized frame before on_ready runs
        let hook_props = Arc::clone(&props);
        let attribution = self.config.attribution.clone();
        loader.set_on_publish(move |size| {
            let props = lock(&hook_props);
            if props.export_handle.is_some() {
                compose(&props, Some(size), &attribution);
            }
        });

        if let Some(cb) = self.on_ready {
            loader.set_on_ready(cb);
        }
        if let Some(cb) = self.on_error {
            loader.set_on_error(cb);
        }

        {
            let current = lock(&props);
            loader.request(&current.image_source, current.device_class)?;
        }
        Ok(Meme {
            props,
            config: self.config,
            loader,
        })
    }
}

fn lock(props: &Mutex<MemeProps>) -> MutexGuard<'_, MemeProps> {
    props.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Render `props` at `size` and publish the frame to the export handle, if any.
fn compose(props: &MemeProps, size: Option<DisplaySize>, attribution: &Attribution) -> String {
    let svg = render_svg(
        size,
        &props.image_source,
        &props.captions(),
        props.device_class,
        attribution,
    );
    if let Some(handle) = &props.export_handle {
        handle.publish(Snapshot {
            size,
            svg: svg.clone(),
        });
    }
    svg
}

/// A captioned image that resolves its own display size
pub struct Meme {
    props: Arc<Mutex<MemeProps>>,
    config: MemeConfig,
    loader: ImageLoader,
}

impl Meme {
    pub fn builder(props: MemeProps) -> MemeBuilder {
        MemeBuilder {
            props,
            config: MemeConfig::default(),
            resolver: None,
            on_ready: None,
            on_error: None,
        }
    }

    /// Create a meme with the default resolver and no handlers.
    pub fn new(props: MemeProps, config: MemeConfig) -> Result<Self> {
        Self::builder(props).config(config).build()
    }

    pub fn with_resolver(
        props: MemeProps,
        config: MemeConfig,
        resolver: Arc<dyn ImageResolver>,
    ) -> Result<Self> {
        Self::builder(props).config(config).resolver(resolver).build()
    }

    pub fn props(&self) -> MemeProps {
        lock(&self.props).clone()
    }

    /// Replace the ready callback; never restarts a resolution.
    pub fn on_ready<F>(&self, cb: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.loader.set_on_ready(cb);
    }

    pub fn on_error<F>(&self, cb: F)
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.loader.set_on_error(cb);
    }

    /// Apply new props.
    ///
    /// A new resolution starts only when the image source or device class
    /// changed. The export handle, if any, receives a fresh frame right away.
    pub fn update(&mut self, props: MemeProps) -> Result<()> {
        if props.image_source.trim().is_empty() {
            return Err(Error::ConfigError("image source must not be empty".to_string()));
        }
        let (source, device) = (props.image_source.clone(), props.device_class);
        *lock(&self.props) = props;

        if self.loader.request(&source, device)? {
            debug!("props changed image to {} ({:?})", source, device);
        }
        self.render();
        Ok(())
    }

    pub fn state(&self) -> LoadState {
        self.loader.state()
    }

    pub fn display_size(&self) -> Option<DisplaySize> {
        self.loader.display_size()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.loader.subscribe()
    }

    /// Wait until the display size for the current props is known.
    pub async fn ready(&self) -> Option<DisplaySize> {
        self.loader.ready().await
    }

    /// Compose the current frame and publish it to the export handle.
    pub fn render(&self) -> String {
        // size is read under the props lock so a concurrent publish is never overwritten
        let props = lock(&self.props);
        compose(&props, self.display_size(), &self.config.attribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NaturalSize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn fixed(width: u32, height: u32) -> Arc<dyn ImageResolver> {
        Arc::new(move |_: &str| -> Result<NaturalSize> { Ok(NaturalSize { width, height }) })
    }

    #[test]
    fn empty_source_is_a_contract_violation() {
        let err = Meme::with_resolver(MemeProps::default(), MemeConfig::default(), fixed(1, 1))
            .err()
            .unwrap();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[tokio::test]
    async fn renders_pending_then_sized() {
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let gate = std::sync::Mutex::new(rx);
        let resolver: Arc<dyn ImageResolver> = Arc::new(move |_: &str| -> Result<NaturalSize> {
            let _ = gate.lock().unwrap().recv();
            Ok(NaturalSize { width: 1200, height: 800 })
        });

        let handle = ExportHandle::new();
        let props = MemeProps::new("cat.png")
            .top_label("top")
            .bottom_label("bottom")
            .export_handle(handle.clone());
        let meme = Meme::with_resolver(props, MemeConfig::default(), resolver).unwrap();

        let pending = meme.render();
        assert!(!pending.contains(r#"width="600""#));
        assert!(!handle.is_ready());

        tx.send(()).unwrap();
        assert_eq!(
            meme.ready().await,
            Some(DisplaySize { width: 600.0, height: 400.0 })
        );
        let sized = meme.render();
        assert!(sized.contains(r#"width="600" height="400""#));
        assert!(handle.is_ready());
        assert_eq!(handle.snapshot().unwrap().svg, sized);
    }

    #[tokio::test]
    async fn caption_updates_do_not_reload() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let resolver: Arc<dyn ImageResolver> = Arc::new(move |_: &str| -> Result<NaturalSize> {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(NaturalSize { width: 300, height: 200 })
        });

        let props = MemeProps::new("cat.png").device_class(DeviceClass::Compact);
        let mut meme = Meme::with_resolver(props.clone(), MemeConfig::default(), resolver).unwrap();
        meme.ready().await;

        meme.update(props.clone().top_label("new caption")).unwrap();
        meme.on_ready(|| {});
        assert!(meme.render().contains("new caption"));
        assert_eq!(meme.display_size(), Some(DisplaySize { width: 300.0, height: 200.0 }));

        meme.update(props.device_class(DeviceClass::Standard)).unwrap();
        meme.ready().await;
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn export_handle_is_sized_when_on_ready_fires() {
        let handle = ExportHandle::new();
        let (tx, rx) = std::sync::mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        let in_callback = handle.clone();

        let (gate_tx, gate_rx) = std::sync::mpsc::channel::<()>();
        let gate = std::sync::Mutex::new(gate_rx);
        let resolver: Arc<dyn ImageResolver> = Arc::new(move |_: &str| -> Result<NaturalSize> {
            let _ = gate.lock().unwrap().recv();
            Ok(NaturalSize { width: 1200, height: 800 })
        });

        let meme = Meme::builder(MemeProps::new("cat.png").export_handle(handle.clone()))
            .resolver(resolver)
            .on_ready(move || {
                let _ = tx.lock().unwrap().send(in_callback.snapshot());
            })
            .build()
            .unwrap();

        // the embedder renders once while pending, then never again
        meme.render();
        assert!(!handle.is_ready());
        gate_tx.send(()).unwrap();

        let seen = rx
            .recv_timeout(Duration::from_secs(2))
            .unwrap()
            .expect("snapshot published");
        assert_eq!(seen.size, Some(DisplaySize { width: 600.0, height: 400.0 }));
        assert!(seen.svg.contains(r#"width="600" height="400""#));
    }

    #[tokio::test]
    async fn update_republishes_captions() {
        let handle = ExportHandle::new();
        let props = MemeProps::new("cat.png").export_handle(handle.clone());
        let mut meme = Meme::with_resolver(props.clone(), MemeConfig::default(), fixed(300, 200)).unwrap();
        meme.ready().await;

        meme.update(props.top_label("fresh caption")).unwrap();
        let snapshot = handle.snapshot().unwrap();
        assert!(snapshot.svg.contains("fresh caption"));
        assert_eq!(snapshot.size, Some(DisplaySize { width: 300.0, height: 200.0 }));
    }

    #[test]
    fn update_rejects_empty_source() {
        let mut meme = Meme::with_resolver(MemeProps::new("cat.png"), MemeConfig::default(), fixed(1, 1)).unwrap();
        assert!(matches!(meme.update(MemeProps::default()), Err(Error::ConfigError(_))));
        assert_eq!(meme.props().image_source, "cat.png");
    }

    #[test]
    fn builder_handlers_see_the_first_resolution() {
        let (tx, rx) = std::sync::mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        let meme = Meme::builder(MemeProps::new("cat.png"))
            .resolver(fixed(10, 20))
            .on_ready(move || {
                let _ = tx.lock().unwrap().send(());
            })
            .build()
            .unwrap();
        rx.recv_timeout(Duration::from_secs(2)).expect("ready fired");
        assert_eq!(meme.display_size(), Some(DisplaySize { width: 10.0, height: 20.0 }));
    }
}
