use crate::collaborators::{
    CollaboratorError, HttpImageFetcher, ImageDecoder, ImageFetcher, OcrEngine, PnmDecoder,
};
use crate::config::ImageConfig;
use crate::domain_utils::UrlInspector;
use crate::signal::{combine, SignalResult};
use crate::vision::{PixelImage, SoftwareVision, VisionProvider};
use base64::Engine;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Pluggable backends for the screenshot engine.
///
/// The decoder is always required. OCR and vision each unlock part of the
/// sub-analyses; with neither present the engine runs in degraded mode. The
/// fetcher only matters for http/https image references.
pub struct ImageCollaborators {
    pub decoder: Arc<dyn ImageDecoder>,
    pub ocr: Option<Arc<dyn OcrEngine>>,
    pub vision: Option<Arc<dyn VisionProvider>>,
    pub fetcher: Option<Arc<dyn ImageFetcher>>,
}

impl ImageCollaborators {
    /// Offline defaults: PNM decoding plus the software vision backend.
    pub fn software_defaults() -> Self {
        Self {
            decoder: Arc::new(PnmDecoder),
            ocr: None,
            vision: Some(Arc::new(SoftwareVision)),
            fetcher: None,
        }
    }

    /// Offline defaults extended with HTTP fetching for url references.
    pub fn with_http_fetcher() -> Result<Self, reqwest::Error> {
        Ok(Self {
            fetcher: Some(Arc::new(HttpImageFetcher::new()?)),
            ..Self::software_defaults()
        })
    }
}

/// Scores screenshots and embedded images by folding five sub-analyses:
/// OCR text content, visual form elements, brand impersonation, layout
/// patterns and color patterns.
pub struct ImageSignalEngine {
    config: ImageConfig,
    url_inspector: UrlInspector,
    collaborators: Option<ImageCollaborators>,
}

impl ImageSignalEngine {
    pub fn new(config: ImageConfig) -> Self {
        Self::with_collaborators(config, Some(ImageCollaborators::software_defaults()))
    }

    pub fn with_collaborators(
        config: ImageConfig,
        collaborators: Option<ImageCollaborators>,
    ) -> Self {
        let url_inspector = UrlInspector::new(config.suspicious_tlds.clone());
        Self {
            url_inspector,
            collaborators,
            config,
        }
    }

    /// Analyze an image reference: a `data:image` url, an http(s) url, or a
    /// filesystem path.
    pub fn analyze(&self, image_ref: &str) -> SignalResult {
        if self.is_degraded() {
            log::warn!("Image backends not configured, returning basic analysis");
            let mut indicators = BTreeSet::new();
            indicators.insert("basic_analysis_only".to_string());
            return SignalResult::degraded(10.0, 0.3, indicators);
        }

        let image = match self.load_image(image_ref) {
            Ok(image) => image,
            Err(e) => {
                log::error!("Failed to load image: {}", e);
                return SignalResult::error("Failed to load image");
            }
        };

        self.analyze_image(&image)
    }

    /// Analyze an already-decoded image.
    pub fn analyze_image(&self, image: &PixelImage) -> SignalResult {
        let analyses = [
            self.text_content_analysis(image),
            self.visual_element_analysis(image),
            self.brand_analysis(image),
            self.layout_analysis(image),
            self.color_analysis(image),
        ];
        combine(&analyses)
    }

    pub fn is_healthy(&self) -> bool {
        let test_image = PixelImage::blank(100, 100);
        self.analyze_image(&test_image).signal().is_some()
    }

    fn is_degraded(&self) -> bool {
        match &self.collaborators {
            Some(collaborators) => collaborators.ocr.is_none() && collaborators.vision.is_none(),
            None => true,
        }
    }

    fn ocr(&self) -> Option<&Arc<dyn OcrEngine>> {
        self.collaborators.as_ref().and_then(|c| c.ocr.as_ref())
    }

    fn vision(&self) -> Option<&Arc<dyn VisionProvider>> {
        self.collaborators.as_ref().and_then(|c| c.vision.as_ref())
    }

    fn load_image(&self, image_ref: &str) -> Result<PixelImage, CollaboratorError> {
        let collaborators = self
            .collaborators
            .as_ref()
            .ok_or("no image backends configured")?;

        if let Some(data_url) = image_ref.strip_prefix("data:image") {
            let payload = match data_url.split_once(',') {
                Some((_, payload)) => payload,
                None => return Err("malformed data url".into()),
            };
            let bytes = base64::engine::general_purpose::STANDARD.decode(payload)?;
            collaborators.decoder.decode(&bytes)
        } else if image_ref.starts_with("http") {
            let fetcher = collaborators
                .fetcher
                .as_ref()
                .ok_or("no image fetcher configured")?;
            let bytes = fetcher.fetch(image_ref)?;
            collaborators.decoder.decode(&bytes)
        } else {
            let bytes = std::fs::read(image_ref)?;
            collaborators.decoder.decode(&bytes)
        }
    }

    fn text_content_analysis(&self, image: &PixelImage) -> SignalResult {
        let ocr = match self.ocr() {
            Some(ocr) => ocr,
            None => return SignalResult::scored(0.0, 0.0, BTreeSet::new()),
        };

        let text = match ocr.extract_text(image) {
            Ok(text) => text,
            Err(e) => {
                log::error!("Text content analysis failed: {}", e);
                return SignalResult::scored(0.0, 0.0, BTreeSet::new());
            }
        };
        if text.trim().is_empty() {
            return SignalResult::scored(0.0, 0.0, BTreeSet::new());
        }

        let text_lower = text.to_lowercase();
        let mut indicators = BTreeSet::new();
        let mut risk_score = 0.0;

        let count_hits = |keywords: &[String]| {
            keywords
                .iter()
                .filter(|keyword| text_lower.contains(keyword.as_str()))
                .count()
        };

        let login_hits = count_hits(&self.config.login_form_keywords);
        if login_hits >= 2 {
            indicators.insert("login_form_detected".to_string());
            risk_score += 30.0;
        }

        let urgency_hits = count_hits(&self.config.urgency_keywords);
        if urgency_hits >= 2 {
            indicators.insert("urgency_language".to_string());
            risk_score += 25.0;
        }

        let financial_hits = count_hits(&self.config.financial_keywords);
        if financial_hits >= 2 {
            indicators.insert("financial_content".to_string());
            risk_score += 20.0;
        }

        let credential_hits = count_hits(&self.config.credential_keywords);
        if credential_hits >= 3 {
            indicators.insert("credential_requests".to_string());
            risk_score += 35.0;
        }

        let suspicious_urls = self
            .url_inspector
            .extract_urls(&text)
            .into_iter()
            .filter(|url| self.url_inspector.is_suspicious(url))
            .count();
        if suspicious_urls > 0 {
            indicators.insert("suspicious_urls_in_text".to_string());
            risk_score += suspicious_urls as f64 * 20.0;
        }

        let confidence =
            ((login_hits + urgency_hits + financial_hits + credential_hits) as f64 / 10.0).min(0.9);
        SignalResult::scored(risk_score, confidence, indicators)
    }

    fn visual_element_analysis(&self, image: &PixelImage) -> SignalResult {
        let vision = match self.vision() {
            Some(vision) => vision,
            None => return SignalResult::scored(0.0, 0.0, BTreeSet::new()),
        };

        let gray = vision.grayscale(image);
        let edges = vision.detect_edges(&gray);
        let contours = vision.find_contours(&edges);

        let mut indicators = BTreeSet::new();
        let mut risk_score = 0.0;

        let mut rectangle_count = 0;
        for contour in &contours {
            if vision.approx_polygon(contour).len() == 4 {
                let area = contour.area();
                if area > 1000.0 && area < 50000.0 {
                    rectangle_count += 1;
                }
            }
        }
        if rectangle_count >= 3 {
            indicators.insert("multiple_form_fields".to_string());
            risk_score += 15.0;
        }

        for contour in &contours {
            let area = contour.area();
            if area > 500.0 && area < 5000.0 {
                let bounds = contour.bounding_box();
                if bounds.height > 0 {
                    let aspect = bounds.width as f64 / bounds.height as f64;
                    if aspect > 0.7 && aspect < 1.3 && bounds.height as f64 > bounds.width as f64 * 0.8
                    {
                        indicators.insert("security_icon_detected".to_string());
                        risk_score += 10.0;
                        break;
                    }
                }
            }
        }

        let has_overlay = contours
            .iter()
            .any(|c| vision.approx_polygon(c).len() == 4 && c.area() > 10000.0);
        if has_overlay {
            indicators.insert("popup_overlay_detected".to_string());
            risk_score += 20.0;
        }

        let confidence = (indicators.len() as f64 / 5.0).min(0.8);
        SignalResult::scored(risk_score, confidence, indicators)
    }

    fn brand_analysis(&self, image: &PixelImage) -> SignalResult {
        let ocr = match self.ocr() {
            Some(ocr) => ocr,
            None => return SignalResult::scored(0.0, 0.0, BTreeSet::new()),
        };

        let text = match ocr.extract_text(image) {
            Ok(text) => text.to_lowercase(),
            Err(e) => {
                log::error!("Brand impersonation analysis failed: {}", e);
                return SignalResult::scored(0.0, 0.0, BTreeSet::new());
            }
        };

        // Length of this list drives the confidence, so duplicates from the
        // color matching stay in until the final set conversion.
        let mut indicator_list: Vec<String> = Vec::new();
        let mut risk_score = 0.0;

        let mentions: Vec<&String> = self
            .config
            .known_brands
            .iter()
            .filter(|brand| text.contains(brand.as_str()))
            .collect();
        if !mentions.is_empty() {
            indicator_list.push("brand_mentions".to_string());
            risk_score += mentions.len() as f64 * 15.0;

            for brand in &mentions {
                if self.has_suspicious_brand_context(&text, brand) {
                    indicator_list.push(format!("suspicious_{}_context", brand));
                    risk_score += 25.0;
                }
            }
        }

        if let Some(vision) = self.vision() {
            let color_matches = self.brand_color_matches(vision.as_ref(), image);
            risk_score += color_matches.len() as f64 * 10.0;
            indicator_list.extend(color_matches);
        }

        let confidence =
            (mentions.len() as f64 * 0.3 + indicator_list.len() as f64 * 0.2).min(0.85);
        SignalResult::scored(risk_score, confidence, indicator_list.into_iter().collect())
    }

    fn layout_analysis(&self, image: &PixelImage) -> SignalResult {
        let vision = match self.vision() {
            Some(vision) => vision,
            None => return SignalResult::scored(0.0, 0.0, BTreeSet::new()),
        };
        let vision = vision.as_ref();

        let mut indicators = BTreeSet::new();
        let mut risk_score = 0.0;

        if self.is_centered_login_form(vision, image) {
            indicators.insert("centered_login_form".to_string());
            risk_score += 20.0;
        }
        if self.is_popup_layout(vision, image) {
            indicators.insert("popup_layout".to_string());
            risk_score += 25.0;
        }
        if self.has_overlay_pattern(vision, image) {
            indicators.insert("overlay_pattern".to_string());
            risk_score += 15.0;
        }
        if self.has_fake_browser_chrome(vision, image) {
            indicators.insert("fake_browser_chrome".to_string());
            risk_score += 30.0;
        }

        let confidence = (indicators.len() as f64 / 4.0).min(0.75);
        SignalResult::scored(risk_score, confidence, indicators)
    }

    fn color_analysis(&self, image: &PixelImage) -> SignalResult {
        let vision = match self.vision() {
            Some(vision) => vision,
            None => return SignalResult::scored(0.0, 0.0, BTreeSet::new()),
        };

        let mut indicators = BTreeSet::new();
        let mut risk_score = 0.0;

        let dominant = vision.dominant_colors(image, 5);
        for (palette_name, palette) in &self.config.warning_palettes {
            for color in &dominant {
                if palette
                    .iter()
                    .any(|reference| color_distance(*color, *reference) < 30.0)
                {
                    indicators.insert(format!("{}_detected", palette_name));
                    risk_score += 15.0;
                    break;
                }
            }
        }

        if self.has_high_contrast_warning(vision.as_ref(), image) {
            indicators.insert("high_contrast_warning".to_string());
            risk_score += 20.0;
        }

        let confidence = (indicators.len() as f64 / 3.0).min(0.7);
        SignalResult::scored(risk_score, confidence, indicators)
    }

    fn has_high_contrast_warning(&self, vision: &dyn VisionProvider, image: &PixelImage) -> bool {
        let hsv = vision.hsv_pixels(image);
        if hsv.is_empty() {
            return false;
        }

        let saturated_bright = hsv.iter().filter(|p| p.s > 150 && p.v > 200).count();
        saturated_bright as f64 / hsv.len() as f64 > 0.1
    }

    fn has_suspicious_brand_context(&self, text: &str, brand: &str) -> bool {
        ["security", "verification", "account", "login", "password"]
            .iter()
            .any(|context| text.contains(&format!("{} {}", brand, context)))
    }

    fn brand_color_matches(&self, vision: &dyn VisionProvider, image: &PixelImage) -> Vec<String> {
        let dominant = vision.dominant_colors(image, 3);
        let mut matches = Vec::new();

        for (brand, brand_palette) in &self.config.brand_colors {
            for color in &dominant {
                if brand_palette
                    .iter()
                    .any(|reference| color_distance(*color, *reference) < 30.0)
                {
                    matches.push(format!("{}_color_pattern", brand));
                }
            }
        }

        matches
    }

    fn is_centered_login_form(&self, vision: &dyn VisionProvider, image: &PixelImage) -> bool {
        let center = image.crop(
            image.width / 4,
            image.height / 4,
            3 * image.width / 4,
            3 * image.height / 4,
        );

        let edges = vision.detect_edges(&vision.grayscale(&center));
        let form_elements = vision
            .find_contours(&edges)
            .iter()
            .filter(|contour| {
                let area = contour.area();
                vision.approx_polygon(contour).len() == 4 && area > 1000.0 && area < 20000.0
            })
            .count();

        form_elements >= 2
    }

    fn is_popup_layout(&self, vision: &dyn VisionProvider, image: &PixelImage) -> bool {
        let center = image.crop(
            image.width / 6,
            image.height / 6,
            5 * image.width / 6,
            5 * image.height / 6,
        );

        let binary = vision.grayscale(&center).threshold(127);
        let edges = vision.detect_edges(&binary);
        // Threshold against the full frame, so only a dialog dominating the
        // screenshot trips this.
        let frame_area = (image.width * image.height) as f64;

        vision
            .find_contours(&edges)
            .iter()
            .any(|contour| {
                vision.approx_polygon(contour).len() == 4 && contour.area() > frame_area * 0.3
            })
    }

    fn has_overlay_pattern(&self, vision: &dyn VisionProvider, image: &PixelImage) -> bool {
        let gray = vision.grayscale(image);
        if gray.data.is_empty() {
            return false;
        }

        let intermediate = gray.data.iter().filter(|&&v| v > 100 && v < 200).count();
        intermediate as f64 / gray.data.len() as f64 > 0.3
    }

    fn has_fake_browser_chrome(&self, vision: &dyn VisionProvider, image: &PixelImage) -> bool {
        let top = image.crop(0, 0, image.width, image.height / 8);
        let edges = vision.detect_edges(&vision.grayscale(&top));

        vision.find_contours(&edges).iter().any(|contour| {
            if vision.approx_polygon(contour).len() != 4 {
                return false;
            }
            let bounds = contour.bounding_box();
            bounds.width as f64 > image.width as f64 * 0.6 && bounds.height < 50
        })
    }
}

fn color_distance(a: [u8; 3], b: [u8; 3]) -> f64 {
    let dr = a[0] as f64 - b[0] as f64;
    let dg = a[1] as f64 - b[1] as f64;
    let db = a[2] as f64 - b[2] as f64;
    (dr * dr + dg * dg + db * db).sqrt()
}
