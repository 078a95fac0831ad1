//! Reference-equality identity for `Rc<dyn Any>`, used as the key of the serialization
//! context's identity map and inline stack.

use std::any::Any;
use std::rc::Rc;

pub type Identity = usize;

pub fn identity(obj: &Rc<dyn Any>) -> Identity {
    Rc::as_ptr(obj) as *const () as usize
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn distinct_instances_have_distinct_identity() {
        let a: Rc<dyn Any> = Rc::new(1i32);
        let b: Rc<dyn Any> = Rc::new(1i32);
        assert_ne!(identity(&a), identity(&b));
    }

    #[test]
    fn clones_share_identity() {
        let a: Rc<dyn Any> = Rc::new(1i32);
        let b = a.clone();
        assert_eq!(identity(&a), identity(&b));
    }
}
