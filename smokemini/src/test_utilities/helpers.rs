//! Assertion macros that return errors instead of panicking

#[macro_export]
macro_rules! is {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(smokemini::Error::new(format!(
                "Failed == check because the value {:#?} != {:#?}",
                $left, $right
            )));
        }
    };
    ($left:expr, $right:expr, $msg:expr) => {
        if $left != $right {
            return Err(smokemini::Error::new(format!(
                "Failed == check because {:#?} != {:#?}: Check '{}'",
                $left, $right, $msg
            )));
        }
    };
}

#[macro_export]
macro_rules! is_not {
    ($left:expr, $right:expr) => {
        if $left == $right {
            return Err(smokemini::Error::new(format!(
                "Failed != check {:#?} == {:#?}",
                $left, $right
            )));
        }
    };
}

#[macro_export]
macro_rules! is_in {
    ($list:expr, $item:expr) => {
        if !$list.iter().any(|x| *x == $item) {
            return Err(smokemini::Error::new(format!(
                "Failed is_in check because {:#?} is not in {:#?}",
                $item, $list
            )));
        }
    };
}
