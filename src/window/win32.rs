//! Win32 backend: registers the window class, creates the top-level frame
//! and turns window messages into [`WindowEvent`]s.
//!
//! ## Handled Messages
//!
//! - **WM_NCCREATE**: Capture and store the per-window state pointer.
//! - **WM_SIZE**: Keep the child window the component created inside the frame
//!   filling the client area, then queue a `Resized` event.
//! - **WM_CLOSE**: Queue `CloseRequested`. The window is not destroyed here;
//!   the controller owns shutdown and exits the process.
//! - **WM_DESTROY**: Post `WM_QUIT`.
//! - **All others**: `DefWindowProcW`.

use std::{cell::RefCell, collections::VecDeque, ffi::c_void, sync::Once};

use anyhow::{Context, Result, anyhow};
use log::{debug, info, warn};
use windows::{
    Win32::{
        Foundation::{HWND, LPARAM, LRESULT, RECT, WPARAM},
        Graphics::Gdi::{HBRUSH, UpdateWindow},
        System::LibraryLoader::GetModuleHandleW,
        UI::WindowsAndMessaging::{
            AdjustWindowRectEx, CREATESTRUCTW, CS_HREDRAW, CS_VREDRAW, CreateWindowExW,
            DefWindowProcW, DispatchMessageW, GW_CHILD, GWLP_USERDATA, GetClientRect,
            GetMessageW, GetSystemMetrics, GetWindow, GetWindowLongPtrW, HICON, IDC_ARROW,
            LoadCursorW, MSG, MoveWindow, PostQuitMessage, RegisterClassW, SM_CXSCREEN,
            SM_CYSCREEN, SW_HIDE, SW_MAXIMIZE, SW_SHOWNORMAL, SWP_NOMOVE, SWP_NOSIZE,
            SWP_NOZORDER, SetWindowLongPtrW, SetWindowPos, ShowWindow, TranslateMessage,
            WINDOW_EX_STYLE, WM_CLOSE, WM_DESTROY, WM_NCCREATE, WM_SIZE, WNDCLASSW,
            WS_CLIPCHILDREN, WS_OVERLAPPEDWINDOW,
        },
    },
    core::PCWSTR,
};

use crate::host::{Dimension, RawSurface, Surface};

use super::{NativeWindow, WindowEvent, WindowFactory};

const WINDOW_CLASS_NAME: PCWSTR = windows::core::w!("CLIENT_HOST_EMBEDDER_WINDOW");

/// Per-window state reachable from the window procedure.
#[derive(Debug, Default)]
struct WindowState {
    events: RefCell<VecDeque<WindowEvent>>,
}

/// # Safety
/// Registered via `WNDCLASSW::lpfnWndProc`; assumes `lpCreateParams` in
/// `WM_NCCREATE` is a valid `*const WindowState` outliving the window.
unsafe extern "system" fn wnd_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    unsafe {
        let state = (GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *const WindowState).as_ref();

        match msg {
            WM_NCCREATE => {
                if let Some(cs) = (lparam.0 as *const CREATESTRUCTW).as_ref() {
                    SetWindowLongPtrW(hwnd, GWLP_USERDATA, cs.lpCreateParams as isize);
                } else {
                    warn!("[Window] CREATESTRUCTW was null");
                }
                DefWindowProcW(hwnd, msg, wparam, lparam)
            }

            WM_SIZE => {
                let width = (lparam.0 & 0xffff) as i32;
                let height = ((lparam.0 >> 16) & 0xffff) as i32;
                if let Ok(child) = GetWindow(hwnd, GW_CHILD) {
                    debug!("[Window] resizing child surface to {}×{}", width, height);
                    let _ = MoveWindow(child, 0, 0, width, height, true);
                }
                if let Some(state) = state {
                    state.events.borrow_mut().push_back(WindowEvent::Resized(Dimension::new(width, height)));
                }
                LRESULT(0)
            }

            WM_CLOSE => {
                info!("[Window] WM_CLOSE");
                if let Some(state) = state {
                    state.events.borrow_mut().push_back(WindowEvent::CloseRequested);
                }
                LRESULT(0)
            }

            WM_DESTROY => {
                SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
                PostQuitMessage(0);
                LRESULT(0)
            }

            other => DefWindowProcW(hwnd, other, wparam, lparam),
        }
    }
}

static REGISTER_CLASS_ONCE: Once = Once::new();

fn register_window_class() -> Result<()> {
    let mut outcome = Ok(());
    REGISTER_CLASS_ONCE.call_once(|| {
        outcome = unsafe {
            (|| -> Result<()> {
                let hinst = GetModuleHandleW(None).context("GetModuleHandleW failed")?;
                let wc = WNDCLASSW {
                    hInstance: hinst.into(),
                    lpszClassName: WINDOW_CLASS_NAME,
                    lpfnWndProc: Some(wnd_proc),
                    style: CS_HREDRAW | CS_VREDRAW,
                    hCursor: LoadCursorW(None, IDC_ARROW).unwrap_or_default(),
                    hbrBackground: HBRUSH::default(),
                    lpszMenuName: PCWSTR::null(),
                    hIcon: HICON::default(),
                    cbClsExtra: 0,
                    cbWndExtra: 0,
                };
                if RegisterClassW(&wc) == 0 {
                    return Err(anyhow!("RegisterClassW failed: {}", std::io::Error::last_os_error()));
                }
                info!("[Window] window class registered");
                Ok(())
            })()
        };
    });
    outcome
}

/// Build a null-terminated UTF-16 string for Win32 APIs.
fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(Some(0)).collect()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Win32WindowFactory;

impl WindowFactory for Win32WindowFactory {
    type Window = Win32Window;

    fn create(&self, title: &str, size: Dimension) -> Result<Win32Window> {
        register_window_class()?;
        let state = Box::new(WindowState::default());
        let title = to_wide(title);
        let hwnd = unsafe {
            let hinst = GetModuleHandleW(None).context("GetModuleHandleW failed")?;
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                WINDOW_CLASS_NAME,
                PCWSTR(title.as_ptr()),
                WS_OVERLAPPEDWINDOW | WS_CLIPCHILDREN,
                0,
                0,
                size.width,
                size.height,
                None,
                None,
                Some(hinst.into()),
                Some(&*state as *const WindowState as *const c_void),
            )
        }
        .context("CreateWindowExW failed")?;
        info!("[Window] main window created: {:?}", hwnd);
        Ok(Win32Window { hwnd, state })
    }
}

#[derive(Debug)]
pub struct Win32Window {
    hwnd: HWND,
    // must outlive the window, the procedure holds a raw pointer to it
    state: Box<WindowState>,
}

impl NativeWindow for Win32Window {
    /// Sizes the window so its client area is exactly `size`.
    fn set_size(&mut self, size: Dimension) {
        let mut rc = RECT { left: 0, top: 0, right: size.width, bottom: size.height };
        unsafe {
            if let Err(e) = AdjustWindowRectEx(&mut rc, WS_OVERLAPPEDWINDOW, false, WINDOW_EX_STYLE::default()) {
                warn!("[Window] AdjustWindowRectEx: {}", e);
            }
            let _ = SetWindowPos(
                self.hwnd,
                None,
                0,
                0,
                rc.right - rc.left,
                rc.bottom - rc.top,
                SWP_NOMOVE | SWP_NOZORDER,
            );
        }
    }

    fn center(&mut self) {
        let mut rc = RECT::default();
        unsafe {
            if windows::Win32::UI::WindowsAndMessaging::GetWindowRect(self.hwnd, &mut rc).is_err() {
                return;
            }
            let (screen_w, screen_h) = (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN));
            let (w, h) = (rc.right - rc.left, rc.bottom - rc.top);
            let _ = SetWindowPos(
                self.hwnd,
                None,
                (screen_w - w).max(0) / 2,
                (screen_h - h).max(0) / 2,
                0,
                0,
                SWP_NOSIZE | SWP_NOZORDER,
            );
        }
    }

    fn maximize(&mut self) {
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_MAXIMIZE);
        }
    }

    fn validate(&mut self) {
        unsafe {
            let _ = UpdateWindow(self.hwnd);
        }
    }

    fn surface(&self) -> Surface {
        let mut rc = RECT::default();
        unsafe {
            let _ = GetClientRect(self.hwnd, &mut rc);
        }
        Surface {
            handle: RawSurface(self.hwnd.0 as isize),
            width: rc.right - rc.left,
            height: rc.bottom - rc.top,
        }
    }

    fn set_visible(&mut self, visible: bool) {
        unsafe {
            let _ = ShowWindow(self.hwnd, if visible { SW_SHOWNORMAL } else { SW_HIDE });
        }
    }

    fn next_event(&mut self) -> Option<WindowEvent> {
        loop {
            if let Some(event) = self.state.events.borrow_mut().pop_front() {
                return Some(event);
            }
            let mut msg = MSG::default();
            unsafe {
                if GetMessageW(&mut msg, None, 0, 0).0 <= 0 {
                    debug!("[Window] message loop ended");
                    return None;
                }
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }
}
