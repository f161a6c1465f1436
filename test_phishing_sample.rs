#![allow(clippy::uninlined_format_args)]

use phish_signal::image_analyzer::ImageSignalEngine;
use phish_signal::sender_analyzer::SenderIdentityAnalyzer;
use phish_signal::signal::{merge_strongest, RiskLevel};
use phish_signal::text_analyzer::TextSignalEngine;
use phish_signal::vision::PixelImage;
use phish_signal::DetectionConfig;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("Testing a classic credential-phishing sample...");

    // A sparse config: defaults fill everything we don't override.
    let config_yaml = r#"
sender:
  trusted_domains:
    - paypal.com
    - google.com
    - microsoft.com
  trusted_display_names:
    - paypal
    - google
    - microsoft
"#;

    let config: DetectionConfig = serde_yaml::from_str(config_yaml)?;
    let text_engine = TextSignalEngine::new(config.text.clone());
    let sender_analyzer = SenderIdentityAnalyzer::new(config.sender.clone());
    let image_engine = ImageSignalEngine::new(config.image.clone());

    let phishing_text = "Dear customer, your PayPal account has been suspended due to \
                         unauthorized access. Urgent action required! Verify your password \
                         immediately at http://paypal-login-verify.tk or your account will \
                         be locked.";
    let phishing_sender = "PayPal Support <security@paypal-secure.tk>";

    println!("\n=== Analyzing the phishing sample ===");
    println!("Sender: {}", phishing_sender);
    println!("Text: {}", phishing_text);

    let result = merge_strongest(
        &text_engine.analyze(phishing_text),
        &sender_analyzer.analyze_sender(phishing_sender),
    );

    println!("\n=== Results ===");
    println!("Risk score: {:.1}", result.risk_score());
    println!("Confidence: {:.2}", result.confidence());
    println!("Indicators:");
    for indicator in result.indicators() {
        println!("  - {}", indicator);
    }

    match result.risk_level() {
        Some(RiskLevel::High) | Some(RiskLevel::Critical) => {
            println!("\n✅ SUCCESS: This message would be flagged as phishing");
        }
        Some(level) => {
            println!("\n❌ MISSED: This message only reached risk level {:?}", level);
        }
        None => {
            println!("\n❌ ERROR: Analysis failed");
        }
    }

    // A routine work email should come out clean.
    println!("\n\n=== Testing a legitimate message ===");
    let legit_text = "Hi team, attached are the meeting notes from Tuesday. \
                      Let me know if I missed anything.";
    let legit_sender = "Alice Johnson <alice@example.org>";

    let legit_result = merge_strongest(
        &text_engine.analyze(legit_text),
        &sender_analyzer.analyze_sender(legit_sender),
    );

    println!("Risk score: {:.1}", legit_result.risk_score());
    println!("Risk level: {:?}", legit_result.risk_level());

    match legit_result.risk_level() {
        Some(RiskLevel::Low) => {
            println!("✅ GOOD: Legitimate message stays at low risk");
        }
        other => {
            println!("⚠️  WARNING: Legitimate message scored {:?}", other);
        }
    }

    // A synthetic screenshot with a large bright dialog over a dark page.
    println!("\n\n=== Testing a popup-style screenshot ===");
    let mut screenshot = PixelImage::blank(300, 200);
    for y in 40..160 {
        for x in 60..240 {
            screenshot.set(x, y, [255, 255, 255]);
        }
    }

    let image_result = image_engine.analyze_image(&screenshot);
    println!("Risk score: {:.1}", image_result.risk_score());
    println!("Indicators:");
    for indicator in image_result.indicators() {
        println!("  - {}", indicator);
    }

    if image_result.indicators().contains("popup_overlay_detected") {
        println!("✅ SUCCESS: The popup overlay was detected");
    } else {
        println!("❌ MISSED: The popup overlay was not detected");
    }

    Ok(())
}
