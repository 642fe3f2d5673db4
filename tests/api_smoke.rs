//! Compile-time smoke test: verify top-level re-exports work.

use baseband_rs::{
    BasebandError, BitCodec, CodecRegistry, Dim, FormatSpec, Mode, Payload, Result, SampleArray,
    SampleShape, SeekTarget, Select, Selector, SqueezedShape, StreamOffsetModel, StreamOptions,
    Whence, unix_timestamp, BITS_PER_WORD,
};

#[test]
fn top_level_imports_compile() {
    // Just verify the types are usable from the crate root
    assert_eq!(BITS_PER_WORD, 32);

    let registry: &CodecRegistry = CodecRegistry::standard();
    let codec: &BitCodec = registry.get(2).unwrap();
    assert_eq!(codec.components_per_word(), 16);

    let shape = SampleShape::named(&[("threads", 1), ("channels", 4)]).unwrap();
    let _dims: &[Dim] = shape.dims();
    let squeezed: SqueezedShape = shape.squeeze();
    assert_eq!(squeezed.unsqueeze(), shape);

    let data = SampleArray::from_real(vec![1.0; 16], &[16]).unwrap();
    let payload: Payload = Payload::from_data(&data, 2).unwrap();
    assert_eq!(payload.sample_count(), 16);

    let _sel: Selector = Selector::samples(0..8).axis(Select::At(0));
    let _target: SeekTarget = SeekTarget::Sample(0);
    let _whence = Whence::Start;
    let _options = StreamOptions::default();
    let _mode: Mode = "rs".parse().unwrap();

    let model: Result<StreamOffsetModel> =
        StreamOffsetModel::new(1_000.0, unix_timestamp(0).unwrap());
    assert!(model.is_ok());

    let _spec = FormatSpec {
        bps: 2,
        sample_shape: SampleShape::scalar(),
        complex: false,
    };

    // BasebandError is accessible
    let _e: Option<BasebandError> = None;
}
