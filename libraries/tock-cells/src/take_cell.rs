use core::cell::UnsafeCell;

/// A mutable memory location that enforces only one outstanding reference to
/// its inner value at a time, like a single-slot `Option<T>` you can only
/// borrow by taking.
pub struct TakeCell<'a, T: 'a + ?Sized> {
    val: UnsafeCell<Option<&'a mut T>>,
}

impl<'a, T: ?Sized> TakeCell<'a, T> {
    pub const fn empty() -> TakeCell<'a, T> {
        TakeCell {
            val: UnsafeCell::new(None),
        }
    }

    pub fn new(val: &'a mut T) -> TakeCell<'a, T> {
        TakeCell {
            val: UnsafeCell::new(Some(val)),
        }
    }

    pub fn is_none(&self) -> bool {
        unsafe { (*self.val.get()).is_none() }
    }

    pub fn is_some(&self) -> bool {
        unsafe { (*self.val.get()).is_some() }
    }

    pub fn take(&self) -> Option<&'a mut T> {
        unsafe { (*self.val.get()).take() }
    }

    pub fn put(&self, val: Option<&'a mut T>) {
        let prev = unsafe { &mut *self.val.get() };
        *prev = val;
    }

    pub fn replace(&self, val: &'a mut T) -> Option<&'a mut T> {
        let prev = unsafe { &mut *self.val.get() };
        prev.replace(val)
    }

    pub fn map<F, R>(&self, closure: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        self.take().map(|val| {
            let res = closure(val);
            self.replace(val);
            res
        })
    }

    pub fn map_or<F, R>(&self, default: R, closure: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        self.map(closure).unwrap_or(default)
    }
}
