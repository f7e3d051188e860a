fn main() {
    cc9995::driver_main();
}
