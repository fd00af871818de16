pub trait Name {
    fn name(&self) -> &String;
}
