use gelignite::convert::{AttributeConverterProvider, ErasedConverter, TypeDescriptor};
use mockall::mock;

mock! {
    pub Provider {}

    impl AttributeConverterProvider for Provider {
        fn converter_for(&self, ty: &TypeDescriptor) -> Option<ErasedConverter>;
    }
}
