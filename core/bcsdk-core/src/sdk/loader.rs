use std::rc::Rc;

use tracing::info;

use super::{DeliveryMode, MessageSink, SdkGlobals, WindowCdApi};
use crate::config::ClientConfig;
use crate::document::{Document, IS_HYBRID_META};

/// Installs the page-side globals the loader script provides.
///
/// Direct mode gets a `cdApi` posting to `sink`. Hybrid mode only gets
/// `bcClientConfiguration`; the client itself comes from the vendor script.
pub fn install_sdk_globals(
    document: &Document,
    globals: &SdkGlobals,
    config: &ClientConfig,
    sink: Rc<dyn MessageSink>,
) -> DeliveryMode {
    if document.metatag_content(IS_HYBRID_META) == "false" {
        globals.install_cd_api(Rc::new(WindowCdApi::new(
            sink,
            config.page_origin.clone(),
            config.direct_configuration(),
        )));
        info!(origin = %config.page_origin, "cdApi installed");
        DeliveryMode::Direct
    } else {
        globals.install_client_configuration(config.hybrid_configuration());
        info!(collector_url = %config.collector_url, "bcClientConfiguration installed");
        DeliveryMode::Hybrid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::RecordingSink;

    #[test]
    fn test_direct_page_gets_cd_api_only() {
        let document = Document::new();
        document.set_meta(IS_HYBRID_META, "false");
        let globals = SdkGlobals::new();

        let mode = install_sdk_globals(
            &document,
            &globals,
            &ClientConfig::default(),
            Rc::new(RecordingSink::new()),
        );

        assert_eq!(mode, DeliveryMode::Direct);
        assert!(globals.cd_api().is_some());
        assert!(globals.client_configuration().is_none());
    }

    #[test]
    fn test_hybrid_page_gets_client_configuration_only() {
        let document = Document::new();
        let globals = SdkGlobals::new();

        let mode = install_sdk_globals(
            &document,
            &globals,
            &ClientConfig::default(),
            Rc::new(RecordingSink::new()),
        );

        assert_eq!(mode, DeliveryMode::Hybrid);
        assert!(globals.cd_api().is_none());
        assert!(globals.bc_client().is_none());
        assert_eq!(
            globals.client_configuration(),
            Some(ClientConfig::default().hybrid_configuration())
        );
    }
}
