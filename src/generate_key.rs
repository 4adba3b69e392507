// generate_key.rs
// Utility to generate a new session signing secret

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;

fn main() {
    println!("Generating new HS256 signing secret...\n");

    let mut bytes = [0u8; 48];
    rand::thread_rng().fill_bytes(&mut bytes);
    let secret = URL_SAFE_NO_PAD.encode(bytes);
    let kid = format!("k{}", chrono::Utc::now().format("%Y%m%d"));

    println!("✅ Secret generated successfully!\n");
    println!("Add this to your .env file:");
    println!("─────────────────────────────────────────────────");
    println!("JWT_KEY_ID={}", kid);
    println!("JWT_SECRET={}", secret);
    println!("─────────────────────────────────────────────────");
    println!("\n⚠️  IMPORTANT:");
    println!("  • Every instance serving the same users needs the same secret");
    println!("  • When rotating, move the old pair to JWT_PREVIOUS_KEYS as kid:secret");
    println!("    until the longest-lived refresh token signed with it has expired");
    println!("  • Keep this secret out of version control");
}
