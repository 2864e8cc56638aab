use shadow_rs::ShadowBuilder;

// Build metadata behind `fleetcron --version`
fn main() {
    if let Err(e) = ShadowBuilder::builder().build() {
        panic!("failed to generate build metadata: {e}");
    }
}
