fn main() {
    println!("cargo:rerun-if-env-changed=WIFI_SSID");
    println!("cargo:rerun-if-env-changed=WIFI_PASS");
    println!("cargo:rerun-if-env-changed=MQTT_HOST");
    println!("cargo:rerun-if-env-changed=MQTT_PORT");
    println!("cargo:rerun-if-env-changed=MQTT_USER");
    println!("cargo:rerun-if-env-changed=MQTT_PASS");
    println!("cargo:rerun-if-env-changed=MQTT_CLIENT_ID");

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
