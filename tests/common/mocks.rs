//! Mock versions of an input resource and of its byte transport.
use mockall::mock;

use fragment_batch_rs::core::resource::Resource;
use std::io::{self, Read};

mock! {
    pub Transport {}
    impl Read for Transport {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    }
}

mock! {
    pub Resource {}
    impl Resource for Resource {
        fn exists(&self) -> bool;
        fn open(&self) -> io::Result<Box<dyn Read>>;
        fn description(&self) -> String;
    }
}
